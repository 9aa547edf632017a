/// Port for fire-and-forget user notifications.
///
/// Implementations must not block and must swallow their own failures.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationPort: Send + Sync {
    /// Shows a notification.
    fn send(&self, title: &str, body: &str);
}
