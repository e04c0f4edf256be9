use stubwire_rpc_service::fault::{catch_fault, catch_fault_async};
use stubwire_rpc_service::routing::{route, shard_key};

#[test]
fn test_catch_fault_passes_values_through() {
    assert_eq!(catch_fault("test", || 21 * 2), Ok(42));
}

#[test]
fn test_catch_fault_recovers_panic_message() {
    let result: Result<(), String> = catch_fault("test", || panic!("bad length"));
    assert_eq!(result, Err("bad length".to_string()));

    let id = 7;
    let result: Result<(), String> = catch_fault("test", || panic!("no product {id}"));
    assert_eq!(result, Err("no product 7".to_string()));
}

#[tokio::test]
async fn test_catch_fault_async_recovers_panic_after_suspension() {
    let result = catch_fault_async("test", async {
        tokio::task::yield_now().await;
        let items: Vec<u32> = Vec::new();
        items[3]
    })
    .await;
    let message = result.unwrap_err();
    assert!(message.contains("index out of bounds"), "{message}");
}

#[test]
fn test_routing_is_deterministic_and_never_zero() {
    let a = route("OLJCESPC7Z");
    let b = route(&"OLJCESPC7Z".to_string());
    assert_eq!(a, b);
    assert_ne!(a, 0);
    assert_ne!(route("66VCHSJNUP"), a);
    assert_ne!(shard_key(&[]), 0);
}
