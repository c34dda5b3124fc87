//! Extract statements run against the source database.

use std::fmt;

/// The source extracts fed to the transform stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extract {
    Employees,
    DailyActive,
    Messages,
    EverUsed,
}

impl Extract {
    pub const ALL: [Extract; 4] = [
        Extract::Employees,
        Extract::DailyActive,
        Extract::Messages,
        Extract::EverUsed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Extract::Employees => "employees",
            Extract::DailyActive => "daily_active",
            Extract::Messages => "messages",
            Extract::EverUsed => "ever_used",
        }
    }

    /// Whether the lookback window applies to this extract.
    pub fn is_windowed(&self) -> bool {
        matches!(self, Extract::DailyActive | Extract::Messages)
    }

    /// SQL for this extract. Windowed extracts take `:start_date` when
    /// `incremental` is set; every dated extract is capped at `:target_date`.
    pub fn sql(&self, incremental: bool) -> String {
        let incremental = incremental && self.is_windowed();
        match self {
            Extract::Employees => EMPLOYEES.to_string(),
            Extract::DailyActive => {
                DAILY_ACTIVE.replace("{window}", &window("dua.ActivateTime", incremental))
            }
            Extract::Messages => MESSAGES.replace("{window}", &window("m.Timestamp", incremental)),
            Extract::EverUsed => EVER_USED.to_string(),
        }
    }
}

impl fmt::Display for Extract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn window(column: &str, incremental: bool) -> String {
    if incremental {
        format!("CAST({} AS DATE) BETWEEN :start_date AND :target_date", column)
    } else {
        format!("CAST({} AS DATE) <= :target_date", column)
    }
}

const EMPLOYEES: &str = r#"
WITH RootOrg AS (
    SELECT OrgId AS RootUnitId,
           OrgName AS RootUnitName,
           OrgId,
           SuperOrgId
    FROM ClassOrg WITH (NOLOCK)
    WHERE RIGHT(OrgId, 4) = '0000'

    UNION ALL

    SELECT r.RootUnitId,
           r.RootUnitName,
           c.OrgId,
           c.SuperOrgId
    FROM ClassOrg AS c WITH (NOLOCK)
    INNER JOIN RootOrg AS r ON c.SuperOrgId = r.OrgId
)
SELECT
    e.EmpId AS EmpId,
    e.UnitId AS UnitId,
    org.OrgName AS UnitName,
    r.RootUnitId AS RootUnitId,
    r.RootUnitName AS RootUnitName,
    CAST(e.InDate AS DATE) AS InDate,
    CAST(e.OutDate AS DATE) AS OutDate
FROM empbas AS e WITH (NOLOCK)
LEFT JOIN RootOrg AS r ON e.UnitId = r.OrgId
LEFT JOIN ClassOrg AS org WITH (NOLOCK) ON e.UnitId = org.OrgId
OPTION (MAXRECURSION 100)
"#;

const DAILY_ACTIVE: &str = r#"
SELECT DISTINCT
    CAST(dua.ActivateTime AS DATE) AS ActiveDate,
    dua.EmpId AS EmpId
FROM UTLife_DailyActivateUser AS dua WITH (NOLOCK)
WHERE {window}
"#;

const MESSAGES: &str = r#"
SELECT
    CAST(m.Timestamp AS DATE) AS MsgDate,
    m.SendEmpid AS EmpId,
    COUNT(1) AS MessageCount
FROM LineGPT_Messages AS m WITH (NOLOCK)
WHERE {window}
GROUP BY CAST(m.Timestamp AS DATE), m.SendEmpid
"#;

const EVER_USED: &str = r#"
SELECT
    dua.EmpId AS EmpId,
    MIN(CAST(dua.ActivateTime AS DATE)) AS FirstActiveDate,
    MAX(CAST(dua.ActivateTime AS DATE)) AS LastActiveDate
FROM UTLife_DailyActivateUser AS dua WITH (NOLOCK)
WHERE CAST(dua.ActivateTime AS DATE) <= :target_date
GROUP BY dua.EmpId
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windowed_extracts_bind_start_date_only_when_incremental() {
        let full = Extract::Messages.sql(false);
        assert!(full.contains("<= :target_date"));
        assert!(!full.contains(":start_date"));

        let incremental = Extract::DailyActive.sql(true);
        assert!(incremental.contains("BETWEEN :start_date AND :target_date"));
        assert!(!incremental.contains("{window}"));
    }

    #[test]
    fn test_unwindowed_extracts_ignore_incremental() {
        assert!(!Extract::EverUsed.sql(true).contains(":start_date"));
        assert!(!Extract::Employees.sql(true).contains(":target_date"));
    }

    #[test]
    fn test_names() {
        let names: Vec<&str> = Extract::ALL.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["employees", "daily_active", "messages", "ever_used"]);
    }
}
