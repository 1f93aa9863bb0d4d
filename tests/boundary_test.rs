use proptest::prelude::*;

use gangway::boundary::NativeModule;
use gangway::module::sample::SampleModule;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    // Any string crosses the boundary verbatim, quotes included.
    #[test]
    fn accepts_any_text_verbatim(text in ".*") {
        let rt = runtime();
        let received = rt.block_on(async {
            let module = SampleModule::new();
            module.accept_text(&text).await.unwrap();
            module.received_text().await
        });
        prop_assert_eq!(received.as_deref(), Some(text.as_str()));
    }

    // Any ordered sequence of strings is accepted, the empty one included.
    #[test]
    fn consumes_any_list(items in proptest::collection::vec(".*", 0..8)) {
        let rt = runtime();
        let consumed = rt.block_on(async {
            let module = SampleModule::new();
            module.consume_list(&items).await.unwrap();
            module.consumed_items()
        });
        prop_assert_eq!(consumed, items.len() as u64);
    }
}

#[tokio::test]
async fn test_reference_probe_text_with_quotes() {
    let module = SampleModule::new();
    let text = "Double quote is my favorite, what're you gonna do? Bite me?";
    module.accept_text(text).await.unwrap();
    assert_eq!(module.received_text().await.as_deref(), Some(text));
}

#[tokio::test]
async fn test_reference_probe_list() {
    let module = SampleModule::new();
    let items: Vec<String> = ["Apple", "Tangerine", "Durian", "Venus fly trap"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    module.consume_list(&items).await.unwrap();
    assert_eq!(module.consumed_items(), 4);
}
