use scraper::{Html, Selector};
use serde_json::Value;

/// All JSON-LD objects in the document, with top-level arrays and `@graph`
/// containers flattened.
fn jsonld_objects(document: &Html) -> Vec<Value> {
    let mut objects = Vec::new();

    if let Ok(script_selector) = Selector::parse("script[type='application/ld+json']") {
        for script in document.select(&script_selector) {
            let raw = script.text().collect::<String>();
            let Ok(json) = serde_json::from_str::<Value>(raw.trim()) else {
                continue;
            };
            let mut pending = vec![json];
            while let Some(value) = pending.pop() {
                match value {
                    Value::Array(items) => pending.extend(items.into_iter().rev()),
                    Value::Object(mut obj) => {
                        if let Some(graph) = obj.remove("@graph") {
                            pending.push(graph);
                        }
                        objects.push(Value::Object(obj));
                    }
                    _ => {}
                }
            }
        }
    }

    objects
}

fn author_names(author: &Value, authors: &mut Vec<String>) {
    match author {
        Value::Array(arr) => {
            for author_obj in arr {
                author_names(author_obj, authors);
            }
        }
        Value::Object(obj) => {
            if let Some(name) = obj.get("name").and_then(|n| n.as_str()) {
                authors.push(name.trim().to_string());
            }
        }
        Value::String(s) => {
            authors.push(s.trim().to_string());
        }
        _ => {}
    }
}

/// Extracts authors from JSON-LD metadata in the HTML document.
/// Returns a vector of author names.
pub fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = Vec::new();
    for json in jsonld_objects(document) {
        if let Some(author) = json.get("author") {
            author_names(author, &mut authors);
        }
    }
    authors.retain(|name| !name.is_empty());
    authors
}

/// First `datePublished` found in JSON-LD metadata.
pub fn extract_date_published(document: &Html) -> Option<String> {
    jsonld_objects(document).into_iter().find_map(|json| {
        json.get("datePublished")
            .and_then(|d| d.as_str())
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_authors_shapes() {
        let html = r#"
            <script type="application/ld+json">
                {"@type": "NewsArticle", "author": [{"name": " Author A "}, {"name": "Author B"}]}
            </script>
            <script type="application/ld+json">
                {"@graph": [{"@type": "WebPage"}, {"@type": "Article", "author": "Author C"}]}
            </script>
            <script type="application/ld+json">not json</script>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(extract_authors(&document), vec!["Author A", "Author B", "Author C"]);
    }

    #[test]
    fn test_extract_authors_none() {
        let document = Html::parse_document("<p>no metadata</p>");
        assert!(extract_authors(&document).is_empty());
    }

    #[test]
    fn test_extract_date_published() {
        let html = r#"
            <script type="application/ld+json">
                [{"@type": "Organization"}, {"@type": "NewsArticle", "datePublished": "2024-01-01T10:00:00Z"}]
            </script>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(
            extract_date_published(&document).as_deref(),
            Some("2024-01-01T10:00:00Z")
        );
    }
}
