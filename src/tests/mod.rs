
mod test_stage_discipline;
