use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

// Mood values are the product's closed set, stored verbatim. The empty
// string is a deliberate member: a patient may log the day without
// naming a mood.
str_enum!(Mood {
    VeryHappy => "Muito feliz",
    Happy => "Feliz",
    Neutral => "Neutro",
    Sad => "Triste",
    VerySad => "Muito triste",
    Unset => "",
});

str_enum!(RequestStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});

// Terminal outcome of a decided engagement request.
str_enum!(RequestOutcome {
    Accepted => "accepted",
    Rejected => "rejected",
});

str_enum!(PracticeType {
    Clinic => "clinica",
    PrivatePractice => "atendimento próprio",
});

str_enum!(FeeBracket {
    Low => "100-150",
    Mid => "200-250",
    High => "300-350",
    Premium => "400+",
});

str_enum!(Insurer {
    Unimed => "unimed",
    Bradesco => "bradesco",
    Amil => "amil",
    Sulamerica => "sulamerica",
    Hapvida => "hapvida",
});

str_enum!(Modality {
    Hybrid => "hibrido",
    Online => "online",
    InPerson => "presencial",
});

/// A professional's accept/reject call on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}
