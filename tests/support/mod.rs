//! Descriptor tables for the example user schema, standing in for the output
//! of a schema code generator.

use std::sync::LazyLock;

use wireform::{EnumDescriptor, FieldDescriptor, FieldKind, MessageDescriptor, OneofDescriptor};

pub static STATUS: LazyLock<EnumDescriptor> = LazyLock::new(|| {
    EnumDescriptor::new(
        "Status",
        vec![
            (0, "STATUS_UNSPECIFIED"),
            (1, "STATUS_ACTIVE"),
            (2, "STATUS_INACTIVE"),
        ],
    )
});

pub static ADDRESS: LazyLock<MessageDescriptor> = LazyLock::new(|| {
    MessageDescriptor::new(
        "Address",
        vec![
            FieldDescriptor::new(1, "street", FieldKind::String),
            FieldDescriptor::new(2, "city", FieldKind::String),
            FieldDescriptor::new(3, "state", FieldKind::String),
            FieldDescriptor::new(4, "zip_code", FieldKind::String),
            FieldDescriptor::new(5, "country", FieldKind::String),
        ],
        vec![],
    )
});

pub static PERSONAL_PROFILE: LazyLock<MessageDescriptor> = LazyLock::new(|| {
    MessageDescriptor::new(
        "PersonalProfile",
        vec![
            FieldDescriptor::new(1, "date_of_birth", FieldKind::String),
            FieldDescriptor::new(2, "hobbies", FieldKind::RepeatedString),
        ],
        vec![],
    )
});

pub static BUSINESS_PROFILE: LazyLock<MessageDescriptor> = LazyLock::new(|| {
    MessageDescriptor::new(
        "BusinessProfile",
        vec![
            FieldDescriptor::new(1, "company_name", FieldKind::String),
            FieldDescriptor::new(2, "job_title", FieldKind::String),
            FieldDescriptor::new(3, "website", FieldKind::String),
        ],
        vec![],
    )
});

pub static USER: LazyLock<MessageDescriptor> = LazyLock::new(|| {
    MessageDescriptor::new(
        "User",
        vec![
            FieldDescriptor::new(1, "id", FieldKind::String),
            FieldDescriptor::new(2, "name", FieldKind::String),
            FieldDescriptor::new(3, "email", FieldKind::String),
            FieldDescriptor::new(
                4,
                "addresses",
                FieldKind::RepeatedMessage(LazyLock::force(&ADDRESS)),
            ),
            FieldDescriptor::new(5, "status", FieldKind::Enum(LazyLock::force(&STATUS))),
            FieldDescriptor::new(
                6,
                "personal",
                FieldKind::Message(LazyLock::force(&PERSONAL_PROFILE)),
            ),
            FieldDescriptor::new(
                7,
                "business",
                FieldKind::Message(LazyLock::force(&BUSINESS_PROFILE)),
            ),
        ],
        vec![OneofDescriptor::new("profile", vec![6, 7])],
    )
});

pub fn address() -> &'static MessageDescriptor {
    LazyLock::force(&ADDRESS)
}

pub fn personal_profile() -> &'static MessageDescriptor {
    LazyLock::force(&PERSONAL_PROFILE)
}

pub fn business_profile() -> &'static MessageDescriptor {
    LazyLock::force(&BUSINESS_PROFILE)
}

pub fn user() -> &'static MessageDescriptor {
    LazyLock::force(&USER)
}
