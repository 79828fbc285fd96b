diesel::table! {
    languages (id) {
        id -> Uuid,
        code -> Text,
        name -> Text,
        native_name -> Text,
        active -> Bool,
    }
}

diesel::table! {
    courses (id) {
        id -> Uuid,
        language_id -> Uuid,
        name -> Text,
        code -> Text,
        description -> Nullable<Text>,
        level -> Int4,
        cefr_level -> Nullable<Text>,
        learning_objectives -> Jsonb,
        estimated_hours -> Nullable<Float8>,
        prerequisites -> Array<Uuid>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    course_skills (id) {
        id -> Uuid,
        course_id -> Uuid,
        skill_id -> Uuid,
        position -> Int4,
    }
}

diesel::table! {
    course_units (id) {
        id -> Uuid,
        course_id -> Uuid,
        name -> Text,
        position -> Int4,
    }
}

diesel::table! {
    course_progress (id) {
        id -> Uuid,
        user_id -> Uuid,
        course_id -> Uuid,
        status -> Text,
        enrollment_date -> Timestamptz,
        completion_date -> Nullable<Timestamptz>,
        total_hours_spent -> Float8,
        skills_completed -> Int4,
        overall_score -> Nullable<Float8>,
    }
}

diesel::joinable!(courses -> languages (language_id));
diesel::joinable!(course_skills -> courses (course_id));
diesel::joinable!(course_units -> courses (course_id));
diesel::joinable!(course_progress -> courses (course_id));

diesel::allow_tables_to_appear_in_same_query!(
    languages,
    courses,
    course_skills,
    course_units,
    course_progress,
);
