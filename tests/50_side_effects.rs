mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};

use common::{app, names, send};

#[tokio::test]
async fn catalog_is_public_and_seeded() -> Result<()> {
    let app = app();
    let res = send(&app, Method::GET, "/api/side-effect-types", None, None).await?;
    assert_eq!(res.status, StatusCode::OK);

    let items = res.body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 20);

    let keys: Vec<(String, String)> = items
        .iter()
        .map(|item| {
            (
                item["category"].as_str().unwrap_or_default().to_string(),
                item["name"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    Ok(())
}

#[tokio::test]
async fn category_filter() -> Result<()> {
    let app = app();
    // 皮膚系
    let res = send(&app, Method::GET, "/api/side-effect-types/category/%E7%9A%AE%E8%86%9A%E7%B3%BB", None, None).await?;
    assert_eq!(res.status, StatusCode::OK);
    let mut found = names(&res.body);
    found.sort();
    let mut expected = vec!["発疹".to_string(), "かゆみ".to_string(), "乾燥".to_string()];
    expected.sort();
    assert_eq!(found, expected);

    let res = send(&app, Method::GET, "/api/side-effect-types/category/unknown", None, None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert!(names(&res.body).is_empty());
    Ok(())
}
