/// Errors that can occur within the notification subsystem.
///
/// Channel implementations return `anyhow::Result` from
/// [`Notifier::deliver`](crate::Notifier::deliver); these variants are the
/// typed causes they wrap, and what [`ChannelRegistry`](crate::plugin::ChannelRegistry)
/// returns while building channels.
///
/// # Examples
///
/// ```rust
/// use monres_notify::error::NotifyError;
///
/// let err = NotifyError::InvalidConfig("missing smtp_host".to_string());
/// assert!(err.to_string().contains("smtp_host"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Channel configuration is missing a required field or contains an invalid value.
    #[error("Notify: invalid channel configuration: {0}")]
    InvalidConfig(String),

    /// The channel type is not registered in the plugin registry.
    #[error("Notify: unknown channel type '{0}'")]
    UnknownChannelType(String),

    /// Two channels were configured with the same name.
    #[error("Notify: duplicate notification channel name '{0}'")]
    DuplicateChannel(String),

    /// An HTTP request to an external notification endpoint failed.
    #[error("Notify: HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// SMTP transport error when sending email.
    #[error("Notify: SMTP error: {0}")]
    SmtpError(String),

    /// The external API returned a non-success response.
    #[error("Notify: API error from {service}: status={status}, body={body}")]
    ApiError {
        service: String,
        status: u16,
        body: String,
    },
}

/// Convenience `Result` alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
