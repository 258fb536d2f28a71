use super::SqlStore;
use crate::{date_dim_stage::DateDimRow, error::PipelineResult};
use rusqlite::params;

impl SqlStore {
    pub fn replace_date_dim(&self, run_id: &str, rows: &[DateDimRow]) -> PipelineResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        tx.execute("DELETE FROM date_dim WHERE run_id = ?1", params![run_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO date_dim (
                     run_id, date_key, year, month, day, quarter,
                     day_of_week, is_weekend, fiscal_year, fiscal_quarter
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            )?;
            for d in rows {
                stmt.execute(params![
                    run_id,
                    d.date_key,
                    d.year,
                    d.month,
                    d.day,
                    d.quarter,
                    d.day_of_week,
                    if d.is_weekend { 1i32 } else { 0i32 },
                    d.fiscal_year,
                    d.fiscal_quarter,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_date_dim(&self, run_id: &str) -> PipelineResult<Vec<DateDimRow>> {
        let mut stmt = self.conn().prepare(
            "SELECT date_key, year, month, day, quarter,
                    day_of_week, is_weekend, fiscal_year, fiscal_quarter
             FROM date_dim WHERE run_id = ?1
             ORDER BY date_key ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(DateDimRow {
                    date_key: row.get(0)?,
                    year: row.get(1)?,
                    month: row.get(2)?,
                    day: row.get(3)?,
                    quarter: row.get(4)?,
                    day_of_week: row.get(5)?,
                    is_weekend: row.get::<_, i32>(6)? != 0,
                    fiscal_year: row.get(7)?,
                    fiscal_quarter: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
