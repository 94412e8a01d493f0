//! The document-database adapter matches the reference store.

weave_storetesting::conformance_tests!(weave_docstore::DocStore::in_memory(
    weave_docstore::DocStoreConfig::default()
));
