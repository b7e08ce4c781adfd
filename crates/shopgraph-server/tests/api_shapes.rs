//! Response-shape tests — validates the JSON contracts the presentation
//! layer consumes, without spinning up an HTTP server.

/// Verify the recommend response shape:
/// { anchor_id, results: [{item_id, score, strategy, item}], total, strategy }
#[test]
fn test_recommend_response_shape() {
    let response = serde_json::json!({
        "anchor_id": "f1",
        "results": [
            {
                "item_id": "f2",
                "score": 7.0,
                "strategy": "graph",
                "item": {
                    "type": "fashion",
                    "id": "f2",
                    "title": "Linen Shirt",
                },
            }
        ],
        "total": 1,
        "strategy": "graph",
    });

    assert!(response["anchor_id"].is_string());
    assert!(response["results"].is_array());
    assert!(response["total"].is_number());
    assert!(response["strategy"].is_string());

    let result = &response["results"][0];
    assert!(result["item_id"].is_string());
    assert!(result["score"].is_number());
    assert!(result["strategy"].is_string());
    assert!(result["item"].is_object());
}

/// Strategy tags are the lowercase names the UI keys its badges on.
#[test]
fn test_strategy_tag_values() {
    use shopgraph_engine::Strategy;

    for (strategy, tag) in [
        (Strategy::Graph, "\"graph\""),
        (Strategy::Content, "\"content\""),
        (Strategy::Trending, "\"trending\""),
    ] {
        assert_eq!(serde_json::to_string(&strategy).unwrap(), tag);
    }
}

/// Verify the feedback response shape: always 200 with a recorded flag.
#[test]
fn test_feedback_response_shape() {
    let response = serde_json::json!({
        "recorded": true,
        "anchor_id": "f1",
        "target_id": "f2",
        "weight": 5.0,
    });

    assert!(response["recorded"].is_boolean());
    assert!(response["anchor_id"].is_string());
    assert!(response["target_id"].is_string());
    assert!(response["weight"].is_number());
}

/// Feedback actions deserialize from the snake_case the frontend sends.
#[test]
fn test_feedback_action_wire_names() {
    use shopgraph_engine::FeedbackAction;

    let viewed: FeedbackAction = serde_json::from_str("\"viewed\"").unwrap();
    assert_eq!(viewed.weight(), 1.0);

    let carted: FeedbackAction = serde_json::from_str("\"added_to_cart\"").unwrap();
    assert_eq!(carted.weight(), 5.0);
}

/// Verify the search response shape.
#[test]
fn test_search_response_shape() {
    let response = serde_json::json!({
        "results": [
            {
                "item_id": "f9",
                "similarity": 0.83,
                "item": {
                    "type": "fashion",
                    "id": "f9",
                    "title": "Red Dress",
                },
            }
        ],
        "total": 1,
        "query": "red dress",
        "search_type": "content",
    });

    assert!(response["results"].is_array());
    assert!(response["total"].is_number());
    assert!(response["query"].is_string());
    assert!(response["search_type"].is_string());

    let result = &response["results"][0];
    assert!(result["item_id"].is_string());
    assert!(result["similarity"].is_number());
    assert!(result["item"]["type"].is_string());
}

/// Verify the stats response shape.
#[test]
fn test_stats_response_shape() {
    let stats = serde_json::json!({
        "items": 1200,
        "fashionItems": 900,
        "bookItems": 300,
        "embeddings": 1150,
        "embeddingDimension": 512,
        "edges": 48000,
        "distinctAnchors": 7600,
        "dbSizeMb": 14.2,
        "matrixLoaded": true,
        "matrixRows": 1150,
        "settings": {
            "minCoOccurrence": 5,
            "graphThreshold": 2,
            "contentThreshold": 0.4,
        },
    });

    assert!(stats["items"].is_number());
    assert!(stats["edges"].is_number());
    assert!(stats["embeddingDimension"].is_number());
    assert!(stats["settings"].is_object());
    assert!(stats["settings"]["minCoOccurrence"].is_number());
    assert!(stats["settings"]["graphThreshold"].is_number());
}

/// Catalog items serialize with their explicit type tag.
#[test]
fn test_catalog_item_wire_shape() {
    use shopgraph_store::CatalogItem;

    let item = CatalogItem::Book {
        id: "b1".into(),
        title: "Dune".into(),
        author: Some("Frank Herbert".into()),
        categories: vec!["Sci-Fi".into()],
        description: None,
        image_base64: None,
    };
    let value = serde_json::to_value(&item).unwrap();

    assert_eq!(value["type"], "book");
    assert_eq!(value["id"], "b1");
    assert_eq!(value["author"], "Frank Herbert");
    // Absent optionals are omitted, not null
    assert!(value.get("description").is_none());
}
