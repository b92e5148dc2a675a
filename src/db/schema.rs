table! {
    cameras (id) {
        id -> BigInt,
        created_at -> Timestamp,
        name -> Text,
        mac_address -> Text,
        site_name -> Text,
        model_no -> Text,
        username -> Text,
        password -> Text,
        version -> Integer,
    }
}
