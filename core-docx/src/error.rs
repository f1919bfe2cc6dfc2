use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DocxError {
    #[error("Document {document_id} has no page block")]
    MissingRoot { document_id: String },

    #[error("Block {0} is reachable from itself")]
    CyclicBlock(String),
}

pub type Result<T> = std::result::Result<T, DocxError>;
