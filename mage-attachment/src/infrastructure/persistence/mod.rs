mod memory;

pub use memory::InMemoryAttachmentStore;
