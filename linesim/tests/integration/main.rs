// Integration tests follow the organization suggested by Matklad:
// https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod line_properties;
mod line_scenarios;
mod resource_contention;
mod simulation_scheduling;
