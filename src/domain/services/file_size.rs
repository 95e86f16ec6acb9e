use crate::domain::entities::candidate_upload::{
    check_upload, CandidateUpload, UploadValidationError,
};

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Renders a byte count in binary units (base 1024), rounded to at most two
/// decimals with trailing zeros trimmed: `0` -> "0 Bytes", `1536` -> "1.5 KB".
pub fn format_file_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return String::from("0 Bytes");
    }

    let exponent = ((size_bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let value = size_bytes as f64 / 1024_f64.powi(exponent as i32);
    // f64's Display drops trailing zeros: 1.0 prints as "1", 1.5 as "1.5"
    let rounded = (value * 100.0).round() / 100.0;

    format!("{} {}", rounded, UNITS[exponent])
}

/// The single line of feedback shown to a user right after selecting a file:
/// the file name and its formatted size when the selection passes validation,
/// or the validation message when it does not.
pub fn selection_feedback(candidate: &CandidateUpload) -> Result<String, UploadValidationError> {
    check_upload(candidate)?;

    // `check_upload` already rejected a missing name
    let file_name = candidate.file_name.unwrap_or_default();

    Ok(format!(
        "{} ({})",
        file_name,
        format_file_size(candidate.size_bytes)
    ))
}
