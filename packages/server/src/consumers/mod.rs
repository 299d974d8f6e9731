pub mod publication;

pub use publication::consume_publication_events;
