use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommandError {
    #[error("command id cannot be empty")]
    EmptyId,

    #[error("command {id} has no target text and no parts")]
    NoTarget { id: String },
}

/// One fragment of a command, typed in sequence during a guided drill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPart {
    pub text: String,
    pub desc: String,
}

/// Grouping shown next to a command, taken from its library folder when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandCategory {
    Kql,
    TSql,
    PySpark,
    CourseLab,
    DeltaLake,
    FullLab,
    MasterLibrary,
    SparkAnalysis,
    FabricCommands,
    Ddl,
    Dml,
    Dql,
    Other,
}

impl CommandCategory {
    /// Category for a known library folder name.
    #[must_use]
    pub fn from_folder(name: &str) -> Option<Self> {
        let category = match name {
            "KQL" => Self::Kql,
            "TSQL" => Self::TSql,
            "PySpark" => Self::PySpark,
            "Course_Lab" => Self::CourseLab,
            "Fabric_Delta_Lake_Library" => Self::DeltaLake,
            "Fabric_Full_Lab_Library" => Self::FullLab,
            "Fabric_Master_Library" => Self::MasterLibrary,
            "Fabric_Spark_Analysis_Library" => Self::SparkAnalysis,
            "Microsoft_Fabric_Command_Library" => Self::FabricCommands,
            _ => return None,
        };
        Some(category)
    }

    /// Statement class inferred from the command text.
    #[must_use]
    pub fn detect(command: &str) -> Self {
        let upper = command.to_uppercase();
        let has = |kw: &str| upper.contains(kw);
        if has("CREATE") || has("DROP") || has("ALTER") {
            Self::Ddl
        } else if has("INSERT") || has("UPDATE") || has("DELETE") {
            Self::Dml
        } else if has("SELECT") {
            Self::Dql
        } else {
            Self::Other
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Kql => "KQL",
            Self::TSql => "T-SQL",
            Self::PySpark => "PySpark",
            Self::CourseLab => "Course Lab",
            Self::DeltaLake => "Delta Lake",
            Self::FullLab => "Full Lab",
            Self::MasterLibrary => "Master Library",
            Self::SparkAnalysis => "Spark Analysis",
            Self::FabricCommands => "Fabric Commands",
            Self::Ddl => "DDL",
            Self::Dml => "DML",
            Self::Dql => "DQL",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A SQL-writing exercise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlCommand {
    id: String,
    title: String,
    description: String,
    full: String,
    parts: Vec<CommandPart>,
    category: CommandCategory,
}

impl SqlCommand {
    /// Build a command. A blank `title` falls back to the id and a blank `full` to the
    /// space-joined part texts.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::EmptyId` for a blank id and `CommandError::NoTarget` when
    /// neither `full` nor any part text is present.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        full: impl Into<String>,
        parts: Vec<CommandPart>,
        category: Option<CommandCategory>,
    ) -> Result<Self, CommandError> {
        let id = id.into().trim().to_owned();
        if id.is_empty() {
            return Err(CommandError::EmptyId);
        }

        let mut full = full.into().trim().to_owned();
        if full.is_empty() {
            full = parts
                .iter()
                .map(|p| p.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
        }
        if full.is_empty() {
            return Err(CommandError::NoTarget { id });
        }

        let title = title.into().trim().to_owned();
        let title = if title.is_empty() { id.clone() } else { title };
        let category = category.unwrap_or_else(|| CommandCategory::detect(&full));

        Ok(Self {
            id,
            title,
            description: description.into().trim().to_owned(),
            full,
            parts,
            category,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Target text the answer is compared against.
    #[must_use]
    pub fn full(&self) -> &str {
        &self.full
    }

    #[must_use]
    pub fn parts(&self) -> &[CommandPart] {
        &self.parts
    }

    #[must_use]
    pub fn category(&self) -> CommandCategory {
        self.category
    }

    /// Non-empty part texts, in order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.parts
            .iter()
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(text: &str, desc: &str) -> CommandPart {
        CommandPart {
            text: text.into(),
            desc: desc.into(),
        }
    }

    #[test]
    fn full_falls_back_to_joined_parts() {
        let cmd = SqlCommand::new(
            "select_top",
            "",
            "",
            "  ",
            vec![part("SELECT TOP 10 *", "projection"), part("", ""), part("FROM sales", "source")],
            None,
        )
        .unwrap();
        assert_eq!(cmd.full(), "SELECT TOP 10 * FROM sales");
        assert_eq!(cmd.title(), "select_top");
        assert_eq!(cmd.category(), CommandCategory::Dql);
        assert_eq!(cmd.keywords().count(), 2);
    }

    #[test]
    fn rejects_commands_without_a_target() {
        assert_eq!(
            SqlCommand::new("x", "", "", "", vec![part(" ", "")], None).unwrap_err(),
            CommandError::NoTarget { id: "x".into() }
        );
        assert_eq!(
            SqlCommand::new(" ", "", "", "SELECT 1", Vec::new(), None).unwrap_err(),
            CommandError::EmptyId
        );
    }

    #[test]
    fn detects_statement_class() {
        assert_eq!(CommandCategory::detect("create table t (a int)"), CommandCategory::Ddl);
        assert_eq!(CommandCategory::detect("DELETE FROM t"), CommandCategory::Dml);
        assert_eq!(CommandCategory::detect("select 1"), CommandCategory::Dql);
        assert_eq!(CommandCategory::detect("OPTIMIZE t"), CommandCategory::Other);
    }

    #[test]
    fn known_folders_map_to_labels() {
        assert_eq!(
            CommandCategory::from_folder("Fabric_Delta_Lake_Library").map(CommandCategory::label),
            Some("Delta Lake")
        );
        assert_eq!(CommandCategory::from_folder("misc"), None);
    }
}
