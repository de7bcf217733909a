pub mod email;
pub mod stdout;
pub mod telegram;
