use std::path::Path;

use common::rpc::{connect, StatusRequest};
use common::task::{JobPhase, Progress};

pub async fn status(socket: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = connect(socket).await?;
    let request = tonic::Request::new(StatusRequest {});
    let response = client.status(request).await?;

    let progress = Progress::from(response.into_inner());
    println!("{}", render(&progress));

    Ok(())
}

fn render(progress: &Progress) -> String {
    let tasks = match progress.phase {
        JobPhase::Mapping => "map tasks",
        JobPhase::Reducing | JobPhase::Done => "reduce tasks",
    };

    format!(
        "[Status]\nphase: {}\n{}: {} pending, {} executing, {} finished",
        progress.phase, tasks, progress.pending, progress.executing, progress.finished
    )
}
