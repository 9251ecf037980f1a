//! Example: watch a character rig being assembled and torn apart

use nodewatch::sched::EventLoop;
use nodewatch::tree::Tree;
use nodewatch::Watcher;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nodewatch=debug")),
        )
        .init();

    let tree = Tree::new();
    let event_loop = EventLoop::new();
    let watcher = Watcher::new(tree.clone(), event_loop.clone());
    let character = tree.create_child(tree.root(), "Character")?;

    let head = watcher.observe_descendant(&character, "Head", |head| {
        println!("head attached: {:?}", head);
        move || println!("head detached: {:?}", head)
    });
    let arms = watcher.observe_children(
        &character,
        [("left", "LeftArm"), ("right", "RightArm")],
        |arms| {
            println!("both arms present: {:?}", arms);
            || println!("an arm went missing")
        },
    );

    let torso = tree.create_child(character, "Torso")?;
    tree.create_child(torso, "Head")?;
    let left = tree.create_child(character, "LeftArm")?;
    tree.create_child(character, "RightArm")?;
    event_loop.run_until_idle()?;

    // Swapped within one tick: the group re-settles once on the new arm.
    tree.destroy(left)?;
    tree.create_child(character, "LeftArm")?;
    event_loop.run_until_idle()?;

    tree.destroy(torso)?;
    event_loop.run_until_idle()?;

    head.disconnect();
    arms.disconnect();
    event_loop.run_until_idle()?;
    Ok(())
}
