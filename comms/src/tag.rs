use crate::rpc::ProtocolErr;

type TagType = u32;
pub const TAG_SIZE: usize = size_of::<TagType>();

const GET_NAME_T: TagType = 0xFA;
const GET_CPU_TIME_T: TagType = 0xFB;
const WORK_T: TagType = 0xFE;
const DIE_T: TagType = 0xFF;

/// Reserved control values, sent ahead of any payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Ask the slave for its name.
    GetName,
    /// Ask the slave for the wall time it spent sampling since the last query.
    ///
    /// Named after CPU time, but no CPU accounting is done.
    GetCpuTime,
    /// A named function call follows.
    Work,
    /// Stop serving.
    Die,
}

impl Tag {
    /// The wire representation of this tag.
    pub fn to_be_bytes(self) -> [u8; TAG_SIZE] {
        TagType::from(self).to_be_bytes()
    }

    /// Decodes a tag from its wire representation.
    ///
    /// # Errors
    /// Returns `ProtocolErr::UnexpectedTag` for values outside the reserved set.
    pub fn from_be_bytes(bytes: [u8; TAG_SIZE]) -> Result<Self, ProtocolErr> {
        Self::try_from(TagType::from_be_bytes(bytes))
    }
}

impl From<Tag> for TagType {
    fn from(tag: Tag) -> Self {
        match tag {
            Tag::GetName => GET_NAME_T,
            Tag::GetCpuTime => GET_CPU_TIME_T,
            Tag::Work => WORK_T,
            Tag::Die => DIE_T,
        }
    }
}

impl TryFrom<TagType> for Tag {
    type Error = ProtocolErr;

    fn try_from(value: TagType) -> Result<Self, Self::Error> {
        match value {
            GET_NAME_T => Ok(Tag::GetName),
            GET_CPU_TIME_T => Ok(Tag::GetCpuTime),
            WORK_T => Ok(Tag::Work),
            DIE_T => Ok(Tag::Die),
            other => Err(ProtocolErr::UnexpectedTag(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_values_match_the_wire_protocol() {
        assert_eq!(TagType::from(Tag::GetName), 0xFA);
        assert_eq!(TagType::from(Tag::GetCpuTime), 0xFB);
        assert_eq!(TagType::from(Tag::Work), 0xFE);
        assert_eq!(TagType::from(Tag::Die), 0xFF);
    }

    #[test]
    fn unreserved_values_are_rejected() {
        let err = Tag::try_from(0xFC).unwrap_err();
        assert!(matches!(err, ProtocolErr::UnexpectedTag(0xFC)));
    }
}
