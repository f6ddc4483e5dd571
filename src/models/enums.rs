use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde uses the same string as the database column.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Administrator => "admin",
    Veterinarian => "veterinarian",
    Staff => "staff",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

str_enum!(SlotBand {
    Morning => "morning",
    Afternoon => "afternoon",
    Evening => "evening",
});

impl Role {
    /// Every role, in display order.
    pub const ALL: [Role; 3] = [Role::Administrator, Role::Veterinarian, Role::Staff];

    pub fn label(self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::Veterinarian => "Veterinarian",
            Self::Staff => "Front Desk",
        }
    }
}

impl AppointmentStatus {
    /// Only scheduled appointments occupy a slot.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Scheduled)
    }
}
