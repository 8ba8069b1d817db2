use std::fmt;

/// A reservation record as held by the remote store.
///
/// The name is unique across the store. The id is assigned by the store on
/// creation and is `None` for records that never reached it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reservation {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub id: Option<u64>,
    pub name: String,
}

impl Reservation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// The remote operations a lookup can perform.
///
/// Together with the service name this keys a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Operation {
    List,
    GetByName,
    GetById,
    Create,
    DeleteByName,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::GetByName,
        Operation::GetById,
        Operation::Create,
        Operation::DeleteByName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::GetByName => "get_by_name",
            Operation::GetById => "get_by_id",
            Operation::Create => "create",
            Operation::DeleteByName => "delete_by_name",
        }
    }

    /// Whether the operation changes the store.
    pub fn is_write(&self) -> bool {
        matches!(self, Operation::Create | Operation::DeleteByName)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation together with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    List,
    GetByName(String),
    GetById(u64),
    Create(Reservation),
    DeleteByName(String),
}

impl Request {
    pub fn operation(&self) -> Operation {
        match self {
            Request::List => Operation::List,
            Request::GetByName(_) => Operation::GetByName,
            Request::GetById(_) => Operation::GetById,
            Request::Create(_) => Operation::Create,
            Request::DeleteByName(_) => Operation::DeleteByName,
        }
    }
}

/// What a remote operation, or its fallback, produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Result of a list, in store order.
    Reservations(Vec<Reservation>),
    /// A single record: the one fetched, or the one created.
    Reservation(Reservation),
    /// A delete went through; carries the requested name.
    Deleted(String),
    /// A write could not be carried out and was not attempted again.
    Unavailable,
}

impl Reply {
    /// Takes the reservations out of a list or single-record reply.
    pub fn into_reservations(self) -> Vec<Reservation> {
        match self {
            Reply::Reservations(all) => all,
            Reply::Reservation(one) => vec![one],
            Reply::Deleted(_) | Reply::Unavailable => Vec::new(),
        }
    }

    pub fn into_reservation(self) -> Option<Reservation> {
        match self {
            Reply::Reservation(one) => Some(one),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Reply::Unavailable)
    }
}
