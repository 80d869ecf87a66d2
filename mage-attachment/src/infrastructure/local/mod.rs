mod filesystem;

pub use filesystem::FilesystemMediaSource;
