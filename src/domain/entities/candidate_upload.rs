use mime::Mime;

/// Maximum accepted size for an uploaded drawing: 16 MiB
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 16 * 1024 * 1024;

/// What we know about an upload before accepting it: enough to run the
/// validation rules, nothing more.
#[derive(Debug)]
pub struct CandidateUpload<'a> {
    pub file_name: Option<&'a str>,
    pub size_bytes: u64,
    pub mime_type: Option<&'a Mime>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum UploadValidationError {
    #[error("No file selected")]
    MissingFile,
    #[error("Only PDF files are allowed")]
    NotAPdf,
    #[error("File is too large. Maximum size is 16 MB")]
    TooLarge,
    #[error("The selected file is empty")]
    EmptyFile,
}

/// Pure validation predicate for an uploaded drawing.
///
/// Rules, in order: a file must be present, it must be a PDF, it must not
/// exceed [`MAX_UPLOAD_SIZE_BYTES`], and it must not be empty. Client-side
/// validation applies the same rules, but this check is the one that counts.
pub fn check_upload(candidate: &CandidateUpload) -> Result<(), UploadValidationError> {
    match candidate.file_name {
        None => return Err(UploadValidationError::MissingFile),
        Some(name) if name.is_empty() => return Err(UploadValidationError::MissingFile),
        Some(_) => (),
    }

    match candidate.mime_type {
        Some(mime_type) if *mime_type == mime::APPLICATION_PDF => (),
        _ => return Err(UploadValidationError::NotAPdf),
    }

    if candidate.size_bytes > MAX_UPLOAD_SIZE_BYTES {
        return Err(UploadValidationError::TooLarge);
    }

    if candidate.size_bytes == 0 {
        return Err(UploadValidationError::EmptyFile);
    }

    Ok(())
}

/// Strips any path components and replaces characters that could be
/// interpreted by the filesystem. Same role as werkzeug's `secure_filename`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);

    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches(|c| c == '_' || c == '.').is_empty() {
        String::from("drawing.pdf")
    } else {
        sanitized
    }
}
