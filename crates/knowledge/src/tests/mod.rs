mod retrieval_scenarios;
mod support;
