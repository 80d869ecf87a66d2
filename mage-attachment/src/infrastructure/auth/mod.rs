mod token;

pub use token::StaticTokenProvider;
