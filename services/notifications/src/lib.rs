//! In-app notifications + best-effort outbound email (spec §4.L).

pub mod email;
pub mod service;
pub mod templates;

pub use email::{EmailMessage, EmailSender, SmtpEmailSender};
pub use service::NotificationService;
