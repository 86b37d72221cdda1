//! Cache Key Builders
//!
//! Namespaced, colon-delimited key construction for the fetch paths that
//! share the cache. Keeping key layout in one place prevents two call sites
//! from caching the same upstream query under different strings.

/// Key for an article-feed query
pub fn article(sort_type: u32, category_id: Option<&str>, limit: usize, cursor: Option<&str>) -> String {
    format!(
        "article:{}:{}:{}:{}",
        sort_type,
        category_id.unwrap_or("all"),
        limit,
        cursor.unwrap_or("")
    )
}

/// Key for a short-post (pin) feed query
pub fn pin(sort_type: u32, topic_id: Option<&str>, limit: usize, cursor: Option<&str>) -> String {
    format!(
        "pin:{}:{}:{}:{}",
        sort_type,
        topic_id.unwrap_or("all"),
        limit,
        cursor.unwrap_or("")
    )
}

/// Key for a keyword search
pub fn search(content_type: &str, keyword: &str, limit: usize) -> String {
    format!("search:{}:{}:{}", content_type, keyword, limit)
}

/// Key for a trend extraction over a time range (hours)
pub fn trend(time_range: u32, category: Option<&str>) -> String {
    format!("trend:{}:{}", time_range, category.unwrap_or("all"))
}

/// Key for a per-user analysis result
pub fn user_analysis(user_id: &str) -> String {
    format!("user_analysis:{}", user_id)
}

/// Key for a recommendation run. Interests are sorted so the same set
/// always produces the same key regardless of caller ordering.
pub fn recommendation(user_id: &str, interests: &[String], algorithm: &str) -> String {
    let mut sorted: Vec<&str> = interests.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    format!("rec:{}:{}:{}", user_id, algorithm, sorted.join(","))
}

/// Key for a content quality score
pub fn quality(content_id: &str, content_type: &str) -> String {
    format!("quality:{}:{}", content_type, content_id)
}

// =============================================================================
// Tests
// =============================================================================
