//now people using the types library can use these types
pub mod error;
pub mod responses;
pub mod speech;

//re-export types for easier access
pub use error::{ApiErrorBody, ErrorDetails};
pub use responses::{OutputContent, OutputItem, ResponsesRequest, ResponsesResponse, Usage};
pub use speech::{AudioFormat, SpeechRequest, Voice};
