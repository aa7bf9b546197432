use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A spinner for one pipeline stage; hidden when tracing is on, so logs stay readable.
pub fn stage_spinner(tui: bool, msg: impl Into<String>) -> ProgressBar {
    if !tui {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::default_spinner()
        .template("{spinner:.magenta} {msg} [{elapsed:.blue}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pb = ProgressBar::new_spinner()
        .with_style(style)
        .with_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Stop a stage spinner, leaving `msg` behind in place of it.
pub fn finish_stage(pb: &ProgressBar, msg: impl Into<String>) {
    match pb.is_hidden() {
        true => pb.finish_and_clear(),
        false => pb.finish_with_message(format!("{} ... done", msg.into())),
    }
}
