use std::path::Path;

use rating_core::model::{ImageDraft, QuestionDraft, QuestionKind};
use services::{AppServices, CatalogError};

pub const DEFAULT_QUESTION: &str = "How would you rate the overall quality of this image?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub images_added: u32,
    pub question_added: bool,
}

/// Insert `1.jpg..=count.jpg` under `image_dir` and a 1..=5 Likert question
/// when the catalog has no questions yet.
///
/// # Errors
///
/// Returns `CatalogError` if an insert fails.
pub async fn seed_catalog(
    services: &AppServices,
    count: u32,
    image_dir: &Path,
) -> Result<SeedReport, CatalogError> {
    let catalog = services.catalog();
    for n in 1..=count {
        let file_name = format!("{n}.jpg");
        let file_path = image_dir.join(&file_name).display().to_string();
        catalog
            .add_image(ImageDraft {
                file_name,
                file_path: Some(file_path),
                description: None,
            })
            .await?;
    }

    let question_added = if catalog.list_questions().await?.is_empty() {
        catalog
            .add_question(QuestionDraft {
                text: DEFAULT_QUESTION.to_string(),
                kind: QuestionKind::Likert,
                min_scale: Some(1),
                max_scale: Some(5),
                step: Some(1),
            })
            .await?;
        true
    } else {
        false
    };

    tracing::info!(images = count, question_added, "catalog seeded");
    Ok(SeedReport {
        images_added: count,
        question_added,
    })
}
