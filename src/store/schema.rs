diesel::table! {
    packets (id) {
        id -> Int8,
        sender_callsign -> Varchar,
        sender_base -> Varchar,
        sender_ssid -> Int2,
        dest_callsign -> Nullable<Varchar>,
        dest_base -> Nullable<Varchar>,
        dest_ssid -> Nullable<Int2>,
        path -> Varchar,
        #[sql_name = "type"]
        packet_type -> Varchar,
        latitude -> Nullable<Double>,
        longitude -> Nullable<Double>,
        speed -> Nullable<Double>,
        course -> Nullable<Int4>,
        wx_wind_direction -> Nullable<Int4>,
        wx_wind_speed -> Nullable<Int4>,
        wx_wind_gust -> Nullable<Int4>,
        wx_temperature -> Nullable<Int4>,
        wx_rain_1h -> Nullable<Int4>,
        wx_rain_24h -> Nullable<Int4>,
        wx_rain_midnight -> Nullable<Int4>,
        wx_humidity -> Nullable<Int4>,
        wx_pressure -> Nullable<Int4>,
        sent_time -> Nullable<Timestamptz>,
        received_at -> Timestamptz,
        raw_content -> Text,
        comment -> Nullable<Text>,
        symbol_table -> Nullable<Varchar>,
        symbol_code -> Nullable<Varchar>,
    }
}
