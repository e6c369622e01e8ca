//! Best-effort desktop notifications; failures are logged and swallowed.

const APP_NAME: &str = "Shotpad";

pub fn send(body: impl Into<String>) {
    let body = body.into();
    let shown = notify_rust::Notification::new()
        .appname(APP_NAME)
        .summary(APP_NAME)
        .body(&body)
        .show();
    if let Err(err) = shown {
        tracing::warn!("desktop notice could not be shown: {err}");
    }
}
