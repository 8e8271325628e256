// Licensed under the Apache-2.0 license

#[derive(Debug, Clone, PartialEq)]
pub enum IpmiError {
    InvalidNetFn,
    InvalidLun,
    InvalidCommand,
    InvalidSelfTestResult,
}
