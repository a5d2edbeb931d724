diesel::table! {
    soft_deleted_blobs (record_id) {
        record_id -> BigInt,
        source_blob_store_name -> Text,
        blob_id -> Text,
        deleted_date -> Text,
        date_path_ref -> Nullable<Text>,
    }
}

diesel::table! {
    blob_store_metrics (blob_store_name) {
        blob_store_name -> Text,
        blob_count -> BigInt,
        total_size -> BigInt,
        upload_count -> BigInt,
        upload_bytes -> BigInt,
        upload_errors -> BigInt,
        download_count -> BigInt,
        download_bytes -> BigInt,
        download_errors -> BigInt,
        delete_count -> BigInt,
        updated -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(soft_deleted_blobs, blob_store_metrics,);
