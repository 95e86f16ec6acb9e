use uuid::Uuid;

use crate::helpers::{spawn_app, spawn_app_with_annotator};

#[tokio::test]
async fn status_of_an_unknown_job_is_not_found() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get_status(&Uuid::new_v4().to_string()).await;

    // Assert
    assert_eq!(404, response.status().as_u16());
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["status"], "not_found");
}

#[tokio::test]
async fn an_uploaded_drawing_eventually_completes_with_a_download_url() {
    // Arrange
    let app = spawn_app().await;
    let job_id = app.upload_sample_drawing().await;

    // Act
    let payload = app.wait_for_terminal_status(&job_id.to_string()).await;

    // Assert
    assert_eq!(payload["status"], "completed");
    assert_eq!(
        payload["download_url"],
        format!("/download/{}", job_id)
    );
    assert!(app.results_storage.has_results(job_id).await);
}

#[tokio::test]
async fn a_failing_annotation_tool_marks_the_job_failed() {
    // Arrange: `false` exits non-zero without producing any page
    let app = spawn_app_with_annotator("false {input}").await;
    let job_id = app.upload_sample_drawing().await;

    // Act
    let payload = app.wait_for_terminal_status(&job_id.to_string()).await;

    // Assert
    assert_eq!(payload["status"], "failed");
    assert!(payload["error"].as_str().unwrap().len() > 0);
    assert!(!app.results_storage.has_results(job_id).await);
}

#[tokio::test]
async fn a_job_without_registry_entry_but_with_an_output_dir_is_processing() {
    // Arrange: simulates a registry wiped by a restart while the annotator
    // is still at work
    let app = spawn_app().await;
    let job_id = Uuid::new_v4();
    tokio::fs::create_dir_all(app.results_storage.job_output_dir(job_id))
        .await
        .unwrap();

    // Act
    let response = app.get_status(&job_id.to_string()).await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["status"], "processing");
}
