mod convert;
mod merge;

pub use convert::image_to_pdf;
pub use merge::merge_documents;
