//! Expands a three-level task tree on a worker pool, then restarts the pool
//! and shows per-worker scratch space.
//!
//! Run with:
//!   RUST_LOG=crawl_tasks=debug cargo run --example task_tree

use crawl_tasks::{Priority, TaskOptions, TaskScheduler, WorkerContext};
use serde::Serialize;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Serialize)]
struct Level {
    n: u32,
}

fn main() -> crawl_tasks::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crawl_tasks=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .init();

    let mut scheduler = TaskScheduler::new();

    let h = scheduler.register(
        TaskOptions::<Level>::new("h").priority(Priority::new("C")?),
        |ctx: &mut WorkerContext, level: &Level| {
            std::thread::sleep(Duration::from_millis(200));
            println!("{} - h {}", ctx.worker_name(), level.n);
            Ok(())
        },
    );
    let g = scheduler.register(
        TaskOptions::<Level>::new("g").priority(Priority::new("B")?),
        move |ctx: &mut WorkerContext, level: &Level| {
            std::thread::sleep(Duration::from_millis(200));
            println!("{} - g {}", ctx.worker_name(), level.n);
            h.call(Level { n: level.n + 1 });
            h.call(Level { n: level.n + 1 });
            Ok(())
        },
    );
    let f = scheduler.register(
        TaskOptions::<Level>::new("f"),
        move |ctx: &mut WorkerContext, level: &Level| {
            std::thread::sleep(Duration::from_millis(200));
            println!("{} - f {}", ctx.worker_name(), level.n);
            g.call(Level { n: level.n + 1 });
            g.call(Level { n: level.n + 1 });
            Ok(())
        },
    );

    scheduler.start(10)?;
    f.call(Level { n: 1 });
    let failures = scheduler.wait();
    println!("tree finished with {} failure(s)", failures.len());
    scheduler.shutdown();

    // Each worker keeps the first name it sees and greets with it from then on
    let greet = scheduler.register(
        TaskOptions::<String>::new("greet"),
        |ctx: &mut WorkerContext, name: &String| {
            let worker = ctx.worker_name().to_string();
            let remembered = ctx
                .scratch()
                .get_or_insert_with("first_name", || vec![name.clone(); 3]);
            for entry in remembered.iter() {
                std::thread::sleep(Duration::from_millis(100));
                println!("{worker} - {entry}");
            }
            Ok(())
        },
    );

    scheduler.start(3)?;
    for name in ["Alice", "Bob", "Cindy", "Dave"] {
        greet.call(name.to_string());
    }
    scheduler.wait();
    scheduler.shutdown();

    println!("\nDone :-)");
    Ok(())
}
