//! Diesel table definitions. Kept in sync with `migrations/`.

diesel::table! {
    app_user (id) {
        id -> Uuid,
        name -> Text,
        role -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    organization_membership (organization_id, member_id) {
        organization_id -> Uuid,
        member_id -> Uuid,
        role -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    event (id) {
        id -> Uuid,
        organization_id -> Uuid,
        creator_id -> Uuid,
        name -> Text,
        description -> Nullable<Text>,
        location -> Nullable<Text>,
        start_at -> Timestamptz,
        end_at -> Timestamptz,
        all_day -> Bool,
        is_public -> Bool,
        is_registerable -> Bool,
        is_invite_only -> Bool,
        is_recurring_template -> Bool,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    recurrence_rule (id) {
        id -> Uuid,
        base_recurring_event_id -> Uuid,
        frequency -> Text,
        interval -> Int4,
        count -> Nullable<Int4>,
        recurrence_start_date -> Timestamptz,
        recurrence_end_date -> Nullable<Timestamptz>,
        by_day -> Nullable<Array<Text>>,
        by_month -> Nullable<Array<Int4>>,
        by_month_day -> Nullable<Array<Int4>>,
        latest_instance_date -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    recurring_event_instance (id) {
        id -> Uuid,
        base_recurring_event_id -> Uuid,
        recurrence_rule_id -> Uuid,
        original_instance_start_time -> Timestamptz,
        actual_start_time -> Timestamptz,
        actual_end_time -> Timestamptz,
        sequence_number -> Int4,
        total_count -> Nullable<Int4>,
        is_cancelled -> Bool,
        organization_id -> Uuid,
        version -> Int4,
        generated_at -> Timestamptz,
        last_updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    event_exception (id) {
        id -> Uuid,
        recurring_event_instance_id -> Uuid,
        exception_data -> Jsonb,
        organization_id -> Uuid,
        creator_id -> Uuid,
        updater_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    event_volunteer (id) {
        id -> Uuid,
        event_id -> Uuid,
        user_id -> Uuid,
        creator_id -> Uuid,
        has_accepted -> Bool,
        is_public -> Bool,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    event_volunteer_group (id) {
        id -> Uuid,
        event_id -> Uuid,
        leader_id -> Uuid,
        creator_id -> Uuid,
        name -> Text,
        description -> Nullable<Text>,
        volunteers_required -> Nullable<Int4>,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    volunteer_membership (id) {
        id -> Uuid,
        volunteer_id -> Uuid,
        group_id -> Nullable<Uuid>,
        event_id -> Uuid,
        status -> Text,
        created_by -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    event_volunteer_exception (id) {
        id -> Uuid,
        volunteer_id -> Uuid,
        recurring_event_instance_id -> Uuid,
        is_excluded -> Bool,
        created_by -> Uuid,
        updated_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    event_volunteer_group_exception (id) {
        id -> Uuid,
        volunteer_group_id -> Uuid,
        recurring_event_instance_id -> Uuid,
        is_excluded -> Bool,
        created_by -> Uuid,
        updated_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(recurrence_rule -> event (base_recurring_event_id));
diesel::joinable!(recurring_event_instance -> event (base_recurring_event_id));
diesel::joinable!(recurring_event_instance -> recurrence_rule (recurrence_rule_id));
diesel::joinable!(event_exception -> recurring_event_instance (recurring_event_instance_id));
diesel::joinable!(event_volunteer -> event (event_id));
diesel::joinable!(event_volunteer_group -> event (event_id));
diesel::joinable!(volunteer_membership -> event_volunteer (volunteer_id));
diesel::joinable!(event_volunteer_exception -> event_volunteer (volunteer_id));
diesel::joinable!(event_volunteer_exception -> recurring_event_instance (recurring_event_instance_id));
diesel::joinable!(event_volunteer_group_exception -> event_volunteer_group (volunteer_group_id));
diesel::joinable!(event_volunteer_group_exception -> recurring_event_instance (recurring_event_instance_id));

diesel::allow_tables_to_appear_in_same_query!(
    app_user,
    organization_membership,
    event,
    recurrence_rule,
    recurring_event_instance,
    event_exception,
    event_volunteer,
    event_volunteer_group,
    volunteer_membership,
    event_volunteer_exception,
    event_volunteer_group_exception,
);
