//! Mountinfo line parser.
//!
//! Only the fields needed to locate cgroup hierarchies are kept. See
//! [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html)
//! for the full layout:
//!
//! ```text
//! 36 35 98:0 /mnt1 /mnt2 rw,noatime master:1 - ext3 /dev/root rw,errors=continue
//! (1)(2)(3)   (4)   (5)      (6)      (7)   (8) (9)   (10)         (11)
//! ```

/// The subset of a mountinfo line this crate cares about.
#[derive(Debug, PartialEq, Eq)]
pub struct MountEntry<'a> {
    /// Root of the mount within the filesystem (field 4).
    pub root: &'a str,
    /// Mount point relative to the process's root (field 5).
    pub mount_point: &'a str,
    /// Filesystem type, e.g. `cgroup` or `cgroup2` (field 9).
    pub fs_type: &'a str,
    /// Superblock options (field 11). For cgroup v1 these list the attached controllers.
    pub super_options: &'a str,
}

impl MountEntry<'_> {
    /// Returns true if `option` appears in the comma-separated superblock options.
    pub fn has_super_option(&self, option: &str) -> bool {
        self.super_options.split(',').any(|o| o == option)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing separator ` - ` in line: `{0}`")]
    MissingSeparator(String),

    #[error("expected at least {expected} fields {section} the separator, found {found}: `{line}`")]
    TooFewFields {
        section: &'static str,
        expected: usize,
        found: usize,
        line: String,
    },
}

const PRE_SEPARATOR_FIELDS: usize = 5;
const POST_SEPARATOR_FIELDS: usize = 3;

/// Parses a single line of `/proc/[pid]/mountinfo`.
///
/// The returned entry borrows from `line`; nothing is allocated on success.
pub fn parse_mount_entry(line: &str) -> Result<MountEntry<'_>, ParseError> {
    let (pre, post) = line
        .split_once(" - ")
        .ok_or_else(|| ParseError::MissingSeparator(line.trim_end().to_owned()))?;

    let mut pre_fields: [&str; PRE_SEPARATOR_FIELDS] = [""; PRE_SEPARATOR_FIELDS];
    let found = fill(&mut pre_fields, pre.split_whitespace());
    if found < PRE_SEPARATOR_FIELDS {
        return Err(ParseError::TooFewFields {
            section: "before",
            expected: PRE_SEPARATOR_FIELDS,
            found,
            line: line.trim_end().to_owned(),
        });
    }

    let mut post_fields: [&str; POST_SEPARATOR_FIELDS] = [""; POST_SEPARATOR_FIELDS];
    let found = fill(&mut post_fields, post.split_whitespace());
    if found < POST_SEPARATOR_FIELDS {
        return Err(ParseError::TooFewFields {
            section: "after",
            expected: POST_SEPARATOR_FIELDS,
            found,
            line: line.trim_end().to_owned(),
        });
    }

    let [_, _, _, root, mount_point] = pre_fields;
    let [fs_type, _, super_options] = post_fields;
    Ok(MountEntry {
        root,
        mount_point,
        fs_type,
        super_options,
    })
}

fn fill<'a>(slots: &mut [&'a str], fields: impl Iterator<Item = &'a str>) -> usize {
    let mut n = 0;
    for (slot, field) in slots.iter_mut().zip(fields) {
        *slot = field;
        n += 1;
    }
    n
}
