use taskbus::{BlockingTaskBus, TaskBus, TaskRequest};

fn main() {
    let task = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "NightlyBackup".to_string());

    let bus = match TaskBus::builder().build() {
        Ok(bus) => BlockingTaskBus::from(bus),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let tasks = bus.tasks();
    let res = tasks
        .stop(TaskRequest::new(task.clone()).force())
        .and_then(|_| tasks.start(TaskRequest::new(task)));
    if let Err(e) = res {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
    println!("restarted");
}
