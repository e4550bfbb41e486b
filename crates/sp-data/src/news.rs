use std::path::Path;

use csv::ReaderBuilder;
use sp_types::{DataError, SpResult};

/// A source article for instruction generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsArticle {
    pub content: String,
}

/// Load news articles from a CSV file.
///
/// The content column is detected from the header row; records with a missing
/// or empty content cell are skipped with a warning rather than aborting the
/// whole ingest.
pub fn load_news_csv<P: AsRef<Path>>(path: P) -> SpResult<Vec<NewsArticle>> {
    let path = path.as_ref();
    tracing::info!("Loading news CSV from: {}", path.display());

    if !path.exists() {
        return Err(DataError::SourceNotFound(path.to_string_lossy().to_string()).into());
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| DataError::LoadingFailed {
            message: format!("Failed to open CSV file {}: {}", path.display(), e),
        })?;

    let headers = rdr
        .headers()
        .map_err(|e| DataError::LoadingFailed {
            message: format!("Failed to read CSV headers: {}", e),
        })?
        .clone();

    let content_idx = detect_content_column(&headers)?;

    let mut articles = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| DataError::LoadingFailed {
            message: format!("Failed to read CSV record at line {}: {}", line_num + 2, e),
        })?;

        match record.get(content_idx) {
            Some(content) if !content.trim().is_empty() => {
                articles.push(NewsArticle {
                    content: content.to_string(),
                });
            }
            _ => {
                tracing::warn!("Skipping record at line {}: empty content", line_num + 2);
            }
        }
    }

    tracing::info!("Loaded {} news articles", articles.len());
    Ok(articles)
}

/// Detect the content column position from CSV headers.
fn detect_content_column(headers: &csv::StringRecord) -> SpResult<usize> {
    for (i, header) in headers.iter().enumerate() {
        match header.to_lowercase().as_str() {
            "content" | "text" | "article" | "body" => return Ok(i),
            _ => {} // Ignore unknown columns
        }
    }

    Err(DataError::ParseError {
        message: "Could not find content column in CSV headers".to_string(),
    }
    .into())
}
