use uuid::Uuid;

use crate::helpers::{sample_pdf_bytes, spawn_app, spawn_app_with_annotator};

#[tokio::test]
async fn upload_returns_a_200_and_a_job_id_for_a_valid_pdf() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_upload(sample_pdf_bytes(), "drawing.pdf", "application/pdf")
        .await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["success"], true);
    assert_eq!(payload["message"], "Processing started");
    assert!(payload["job_id"].as_str().unwrap().parse::<Uuid>().is_ok());
}

#[tokio::test]
async fn upload_returns_a_400_when_no_file_is_sent() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.post_upload_without_file().await;

    // Assert
    assert_eq!(400, response.status().as_u16());
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["error"], "No file selected");
}

#[tokio::test]
async fn upload_returns_a_400_for_a_non_pdf_file() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_upload(b"not a drawing".to_vec(), "notes.txt", "text/plain")
        .await;

    // Assert
    assert_eq!(400, response.status().as_u16());
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["error"], "Only PDF files are allowed");
}

#[tokio::test]
async fn upload_returns_a_400_for_an_oversized_pdf() {
    // Arrange
    let app = spawn_app().await;
    let oversized = vec![0_u8; 16 * 1024 * 1024 + 1];

    // Act
    let response = app
        .post_upload(oversized, "huge.pdf", "application/pdf")
        .await;

    // Assert
    assert_eq!(400, response.status().as_u16());
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["error"], "File is too large. Maximum size is 16 MB");
}

#[tokio::test]
async fn upload_accepts_a_pdf_at_exactly_the_size_limit() {
    // Arrange
    let app = spawn_app().await;
    let mut content = sample_pdf_bytes();
    content.resize(16 * 1024 * 1024, b' ');

    // Act
    let response = app
        .post_upload(content, "drawing.pdf", "application/pdf")
        .await;

    // Assert
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn the_mode_form_field_reaches_the_annotation_command() {
    // Arrange: the annotator names its output after the requested mode
    let app = spawn_app_with_annotator("cp {input} {output_dir}/page_001_{mode}.pdf").await;

    // Act
    let response = app
        .post_upload_with_mode(sample_pdf_bytes(), "drawing.pdf", "application/pdf", "manual")
        .await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let payload: serde_json::Value = response.json().await.unwrap();
    let job_id: Uuid = payload["job_id"].as_str().unwrap().parse().unwrap();

    let status = app.wait_for_terminal_status(&job_id.to_string()).await;
    assert_eq!(status["status"], "completed");

    let bytes = tokio::fs::read(app.results_storage.results_archive_path(job_id))
        .await
        .unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    assert!(archive.by_name("page_001_manual.pdf").is_ok());
}

#[tokio::test]
async fn uploads_without_a_mode_field_default_to_automatic_detection() {
    // Arrange
    let app = spawn_app_with_annotator("cp {input} {output_dir}/page_001_{mode}.pdf").await;

    // Act
    let job_id = app.upload_sample_drawing().await;

    // Assert
    let status = app.wait_for_terminal_status(&job_id.to_string()).await;
    assert_eq!(status["status"], "completed");

    let bytes = tokio::fs::read(app.results_storage.results_archive_path(job_id))
        .await
        .unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    assert!(archive.by_name("page_001_auto.pdf").is_ok());
}

#[tokio::test]
async fn upload_returns_a_400_for_an_empty_file() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_upload(Vec::new(), "empty.pdf", "application/pdf")
        .await;

    // Assert
    assert_eq!(400, response.status().as_u16());
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["error"], "The selected file is empty");
}
