diesel::table! {
    components (id) {
        id -> BigInt,
        repository -> Text,
        namespace -> Text,
        name -> Text,
        version -> Text,
        kind -> Nullable<Text>,
        attributes -> Jsonb,
        created -> Text,
    }
}

diesel::table! {
    asset_blobs (id) {
        id -> BigInt,
        blob_ref -> Text,
        blob_size -> BigInt,
        content_type -> Text,
        checksums -> Jsonb,
        blob_created -> Text,
        created_by -> Nullable<Text>,
    }
}

diesel::table! {
    assets (id) {
        id -> BigInt,
        repository -> Text,
        path -> Text,
        component_id -> Nullable<BigInt>,
        asset_blob_id -> Nullable<BigInt>,
        kind -> Nullable<Text>,
        attributes -> Jsonb,
        created -> Text,
    }
}

diesel::joinable!(assets -> components (component_id));
diesel::joinable!(assets -> asset_blobs (asset_blob_id));

diesel::allow_tables_to_appear_in_same_query!(assets, asset_blobs, components,);
