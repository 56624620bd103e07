/* One engine shared across threads */

use constructor_engine::{EventBus, FactoryRegistry, ResolutionEngine};
use constructor_types::TypeTable;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

fn load_table() -> TypeTable {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/shapes.yaml");
    TypeTable::load(&path).expect("load shapes table")
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn engine_is_send_and_sync() {
    assert_send_sync::<ResolutionEngine<TypeTable>>();
    assert_send_sync::<ResolutionEngine<Arc<TypeTable>>>();
    assert_send_sync::<EventBus>();
    assert_send_sync::<FactoryRegistry>();
}

#[test]
fn parallel_builds_share_one_descriptor_cache() {
    let engine = ResolutionEngine::new(load_table());

    let renders: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8i64)
            .map(|idx| {
                let engine = &engine;
                scope.spawn(move || {
                    engine
                        .emit_json(
                            "Group",
                            json!({"members": [{"x": idx, "y": 0}, {"x": 0, "y": idx}]}),
                        )
                        .expect("emit Group")
                        .render()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("builder thread"))
            .collect()
    });

    for (idx, render) in renders.iter().enumerate() {
        assert_eq!(
            render,
            &format!(
                r#"Group::new(vec![Point::new({idx}, 0), Point::new(0, {idx})], "group")"#
            )
        );
    }

    /* Group and Point, each stored exactly once */
    assert_eq!(engine.cache().len(), 2);
    let first = engine.descriptors("Point").expect("Point descriptors");
    let second = engine.descriptors("Point").expect("Point descriptors");
    assert!(Arc::ptr_eq(&first, &second));
}
