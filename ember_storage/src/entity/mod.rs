//! sea-orm entities for the durable schema.

pub mod conversations;
pub mod memories;
