pub mod completion;
pub mod content_guard;
pub mod pdf;

#[cfg(test)]
pub mod mock_completion;
