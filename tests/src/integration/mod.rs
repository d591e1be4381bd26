mod provenance;
mod scenarios;
