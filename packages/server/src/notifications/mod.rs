//! Publication fan-out to every registered user.

pub mod delivery;
pub mod mailer;
pub mod notifier;
pub mod outbox;

pub use delivery::{DeliveryOutcome, PublicationDelivery};
pub use mailer::{Mailer, MemoryMailer, build_mailer};
pub use notifier::{InProcessNotifier, PublicationNotifier, QueueNotifier, dispatch};
pub use outbox::run_outbox_sweeper;
