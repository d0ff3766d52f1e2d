use std::path::Path;

use indicatif::ProgressBar;
use par_warehouse::labels::parse;
use par_warehouse::pipeline::{demographics, immigration, labels, temperature};
use par_warehouse::utils::io::{SUCCESS_MARKER, read_immigration_source};
use par_warehouse::{Pipeline, RecordBatch, Session, WarehouseConfig, WarehouseError, read_table, run_all};
use tempfile::TempDir;

use crate::utils::{
    SAMPLE_LABELS, dates, decimals, ints, longs, strings, strings_batch, write_file,
};

fn owned(values: &[Option<&str>]) -> Vec<Option<String>> {
    values.iter().map(|v| v.map(str::to_string)).collect()
}

fn arrivals() -> par_warehouse::Result<RecordBatch> {
    strings_batch(&[
        ("cicid", &[Some("5748517.0"), Some("5748518.0"), Some("5748519.0")]),
        ("i94yr", &[Some("2016.0"), Some("2016.0"), Some("2016.0")]),
        ("i94mon", &[Some("4.0"), Some("4.0"), Some("4.0")]),
        ("i94cit", &[Some("245.0"), Some("245.0"), Some("245.0")]),
        ("i94res", &[Some("438.0"), Some("438.0"), Some("438.0")]),
        ("i94port", &[Some("LOS"), Some("NYC"), Some("NYC")]),
        ("arrdate", &[Some("20574.0"), Some("20545.0"), Some("20545.0")]),
        ("i94mode", &[Some("1.0"), Some("1.0"), None]),
        ("i94bir", &[Some("40.0"), Some("32.0"), Some("29.0")]),
        ("I94VISA", &[Some("2.0"), Some("3.0"), Some("2.0")]),
        ("gender", &[Some("F"), Some("M"), None]),
        ("airline", &[Some("QF"), Some("AA"), Some("AA")]),
        ("visatype", &[Some("B2"), Some("F1"), Some("B2")]),
    ])
}

/// Only pleasure visits with complete keys reach the date and fact tables
#[test]
fn test_immigration_keeps_pleasure_visits() -> par_warehouse::Result<()> {
    let tables = immigration::build_tables(&arrivals()?)?;
    let (date_dim, fact) = (&tables[0], &tables[1]);

    assert_eq!(date_dim.name, immigration::DATE_TABLE);
    assert_eq!(fact.name, immigration::ARRIVALS_TABLE);
    assert_eq!(fact.partition_by, vec!["arrival_year", "arrival_month"]);

    // 20574 days after 1960-01-01 is 2016-04-30, day 16921 of the Unix epoch
    assert_eq!(longs(&fact.batch, "cicid"), vec![Some(5_748_517)]);
    assert_eq!(dates(&fact.batch, "arrival_date"), vec![Some(16_921)]);
    assert_eq!(ints(&fact.batch, "arrival_year"), vec![Some(2016)]);
    assert_eq!(ints(&fact.batch, "travel_mode_code"), vec![Some(1)]);
    assert_eq!(ints(&fact.batch, "visitor_residence_country"), vec![Some(438)]);
    assert_eq!(strings(&fact.batch, "travel_visa_type"), owned(&[Some("B2")]));

    assert_eq!(dates(&date_dim.batch, "arrival_date"), vec![Some(16_921)]);
    assert_eq!(ints(&date_dim.batch, "day"), vec![Some(30)]);
    assert_eq!(ints(&date_dim.batch, "week"), vec![Some(17)]);
    assert_eq!(ints(&date_dim.batch, "month"), vec![Some(4)]);
    assert_eq!(ints(&date_dim.batch, "year"), vec![Some(2016)]);
    assert_eq!(ints(&date_dim.batch, "quarter"), vec![Some(2)]);
    Ok(())
}

/// Country, port and travel mode dimensions from the label text
#[test]
fn test_label_dimensions() -> par_warehouse::Result<()> {
    let tables = labels::build_tables(&parse(SAMPLE_LABELS))?;
    let names = tables.iter().map(|t| t.name.as_str()).collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![labels::COUNTRY_TABLE, labels::PORT_TABLE, labels::TRAVEL_MODE_TABLE]
    );

    let countries = &tables[0].batch;
    assert_eq!(
        ints(countries, "country_code"),
        vec![Some(582), Some(236), Some(101), Some(754), Some(999)]
    );
    assert_eq!(strings(countries, "country")[3], Some("COTE D'IVOIRE".to_string()));

    let ports = &tables[1].batch;
    let columns = ports
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect::<Vec<_>>();
    assert_eq!(columns, vec!["port_code", "city", "state_code", "state"]);
    // Ports without a known state are dropped by the join
    assert_eq!(
        strings(ports, "port_code"),
        owned(&[Some("ALC"), Some("ANC"), Some("BAR"), Some("NYC")])
    );
    assert_eq!(
        strings(ports, "city"),
        owned(&[Some("ALCAN"), Some("ANCHORAGE"), Some("BAKER AAF - BAKER ISLAND"), Some("NEW YORK")])
    );
    assert_eq!(
        strings(ports, "state"),
        owned(&[Some("ALASKA"), Some("ALASKA"), Some("ALASKA"), Some("NEW YORK")])
    );

    let modes = &tables[2].batch;
    assert_eq!(
        ints(modes, "travel_mode_code"),
        vec![Some(1), Some(2), Some(3), Some(9)]
    );
    Ok(())
}

/// A label file without the port section fails the pipeline
#[test]
fn test_label_dimensions_need_every_section() {
    let sections = parse("value i94cntyl\n582 = 'MEXICO' ;\n");
    assert!(matches!(
        labels::build_tables(&sections),
        Err(WarehouseError::MissingSection(_))
    ));
}

const DEMOGRAPHICS_CSV: &str = "\
City;State;Median Age;Male Population;Female Population;Total Population;Number of Veterans;Foreign-born;Average Household Size;State Code;Race;Count
Silver Spring;Maryland;33.8;40601;41862;82463;1562;30908;2.6;MD;Hispanic or Latino;25924
Silver Spring;Maryland;33.8;40601;41862;82463;1562;30908;2.6;MD;White;37756
Silver Spring;Maryland;33.8;40601;41862;82463;1562;30908;2.6;MD;Asian;8841
Silver Spring;Maryland;33.8;40601;41862;82463;1562;30908;2.6;MD;Black or African-American;21330
Silver Spring;Maryland;33.8;40601;41862;82463;1562;30908;2.6;MD;American Indian and Alaska Native;1084
Quincy;Massachusetts;41.0;44129;49500;93629;4147;32935;2.39;MA;White;58723
Quincy;Massachusetts;41.0;44129;49500;93629;4147;32935;2.39;MA;Asian;
";

/// Five race rows of one city collapse into one wide row
#[test]
fn test_demographics_pivot() -> par_warehouse::Result<()> {
    let dir = TempDir::new()?;
    let path = write_file(dir.path(), "demographics.csv", DEMOGRAPHICS_CSV);
    let raw = par_warehouse::utils::io::read_delimited(&path, b';', 1024)?;

    let tables = demographics::build_tables(&raw)?;
    let batch = &tables[0].batch;
    assert_eq!(batch.num_rows(), 2);
    assert!(tables[0].partition_by.is_empty());

    assert_eq!(strings(batch, "city"), owned(&[Some("Silver Spring"), Some("Quincy")]));
    assert_eq!(strings(batch, "state_code"), owned(&[Some("MD"), Some("MA")]));
    assert_eq!(decimals(batch, "median_age"), owned(&[Some("33.8"), Some("41.0")]));
    assert_eq!(
        decimals(batch, "average_household_size"),
        owned(&[Some("2.60"), Some("2.39")])
    );
    assert_eq!(ints(batch, "number_of_foreign_born"), vec![Some(30908), Some(32935)]);

    assert_eq!(ints(batch, "hispanic_or_latino"), vec![Some(25924), None]);
    assert_eq!(ints(batch, "white"), vec![Some(37756), Some(58723)]);
    // The Quincy Asian row has no count and is not admitted
    assert_eq!(ints(batch, "asian"), vec![Some(8841), None]);
    assert_eq!(ints(batch, "black_or_african_american"), vec![Some(21330), None]);
    assert_eq!(ints(batch, "american_indian_alaska_native"), vec![Some(1084), None]);
    Ok(())
}

const TEMPERATURE_CSV: &str = "\
dt,AverageTemperature,AverageTemperatureUncertainty,City,Country,Latitude,Longitude
2013-07-01,20.5,0.3,Austin,United States,29.74N,97.85W
2013-07-01,21.5,0.3,Austin,United States,29.74N,97.85W
2013-08-01,25.25,0.3,Austin,United States,29.74N,97.85W
2013-07-01,,0.3,Boston,United States,42.59N,72.00W
2013-07-01,10.0,0.2,Oslo,Norway,60.27N,10.33E
1743-11-01,5.123,2.1,Oslo,Norway,60.27N,10.33E
";

type MonthlyMean = (Option<i32>, Option<i32>, Option<String>, Option<String>);

/// Rows of a temperature table in a fixed order for comparison
fn monthly_means(batch: &RecordBatch, key: &str) -> Vec<MonthlyMean> {
    let mut rows = ints(batch, "year")
        .into_iter()
        .zip(ints(batch, "month"))
        .zip(strings(batch, key))
        .zip(decimals(batch, "average_temperature"))
        .map(|(((year, month), key), mean)| (year, month, key, mean))
        .collect::<Vec<_>>();
    rows.sort();
    rows
}

fn mean_row(year: i32, month: i32, key: &str, mean: &str) -> MonthlyMean {
    (Some(year), Some(month), Some(key.to_string()), Some(mean.to_string()))
}

/// Monthly means of whole-degree readings, split into US cities and other countries
#[test]
fn test_temperature_tables() -> par_warehouse::Result<()> {
    let dir = TempDir::new()?;
    let path = write_file(dir.path(), "temperature.csv", TEMPERATURE_CSV);
    let raw = par_warehouse::utils::io::read_delimited(&path, b',', 1024)?;

    let tables = temperature::build_tables(&raw)?;
    let (us, countries) = (&tables[0], &tables[1]);
    assert_eq!(us.partition_by, vec!["year", "month"]);

    // 20.5 and 21.5 round half away from zero to 21 and 22
    assert_eq!(
        monthly_means(&us.batch, "city"),
        vec![
            mean_row(2013, 7, "Austin", "21.50"),
            mean_row(2013, 8, "Austin", "25.00"),
        ]
    );
    assert_eq!(
        monthly_means(&countries.batch, "country"),
        vec![
            mean_row(1743, 11, "Norway", "5.00"),
            mean_row(2013, 7, "Norway", "10.00"),
        ]
    );
    Ok(())
}

/// Readings below one half round toward the lower degree
#[test]
fn test_temperature_readings_round_before_mean() -> par_warehouse::Result<()> {
    let raw = strings_batch(&[
        ("dt", &[Some("2013-07-01"), Some("2013-07-01")]),
        ("AverageTemperature", &[Some("20.4"), Some("21.4")]),
        ("City", &[Some("Austin"), Some("Austin")]),
        ("Country", &[Some("United States"), Some("United States")]),
    ])?;

    let tables = temperature::build_tables(&raw)?;
    assert_eq!(
        monthly_means(&tables[0].batch, "city"),
        vec![mean_row(2013, 7, "Austin", "20.50")]
    );
    Ok(())
}

/// A mean that does not fit the decimal column becomes null and the row is dropped
#[test]
fn test_temperature_overflow_drops_row() -> par_warehouse::Result<()> {
    let raw = strings_batch(&[
        ("dt", &[Some("2013-07-01"), Some("2013-07-01")]),
        ("AverageTemperature", &[Some("150.0"), Some("12.0")]),
        ("City", &[Some("Death Valley"), Some("Austin")]),
        ("Country", &[Some("United States"), Some("United States")]),
    ])?;

    let tables = temperature::build_tables(&raw)?;
    assert_eq!(
        monthly_means(&tables[0].batch, "city"),
        vec![mean_row(2013, 7, "Austin", "12.00")]
    );
    assert_eq!(tables[1].num_rows(), 0);
    Ok(())
}

const IMMIGRATION_CSV: &str = "\
cicid,i94yr,i94mon,i94cit,i94res,i94port,arrdate,i94mode,i94bir,i94visa,gender,airline,visatype
5748517.0,2016.0,4.0,245.0,438.0,LOS,20574.0,1.0,40.0,2.0,F,QF,B2
5748518.0,2016.0,4.0,245.0,438.0,NYC,20545.0,1.0,32.0,3.0,M,AA,F1
5748520.0,2016.0,4.0,101.0,101.0,NYC,20545.0,1.0,25.0,2.0,,AA,B2
";

fn write_sources(input: &Path) {
    write_file(input, "GlobalLandTemperaturesByCity.csv", TEMPERATURE_CSV);
    write_file(input, "us-cities-demographics.csv", DEMOGRAPHICS_CSV);
    write_file(input, "immigration.csv", IMMIGRATION_CSV);
    write_file(input, "I94_SAS_Labels_Descriptions.SAS", SAMPLE_LABELS);
}

/// Every pipeline runs in one session and writes all eight tables
#[test]
fn test_run_all_writes_every_table() -> par_warehouse::Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    write_sources(input.path());

    let mut config = WarehouseConfig::new(input.path(), output.path());
    config.sources.immigration = "immigration.csv".into();
    config.threads = Some(2);
    let session = Session::new(config)?;
    assert_eq!(session.threads(), 2);

    let reports = run_all(&session, &ProgressBar::hidden())?;
    assert_eq!(reports.len(), Pipeline::ALL.len());

    let tables = [
        temperature::US_CITIES_TABLE,
        temperature::COUNTRIES_TABLE,
        demographics::DEMOGRAPHICS_TABLE,
        immigration::DATE_TABLE,
        immigration::ARRIVALS_TABLE,
        labels::COUNTRY_TABLE,
        labels::PORT_TABLE,
        labels::TRAVEL_MODE_TABLE,
    ];
    for name in tables {
        assert!(
            output.path().join(name).join(SUCCESS_MARKER).is_file(),
            "{name} was not written"
        );
    }
    assert!(!output.path().join(labels::STATE_TABLE).exists());

    let fact = read_table(&output.path().join(immigration::ARRIVALS_TABLE))?;
    let mut cicids = fact.iter().flat_map(|b| longs(b, "cicid")).collect::<Vec<_>>();
    cicids.sort();
    assert_eq!(cicids, vec![Some(5_748_517), Some(5_748_520)]);
    for batch in &fact {
        assert!(ints(batch, "arrival_year").iter().all(|y| *y == Some(2016)));
        assert!(ints(batch, "arrival_month").iter().all(|m| *m == Some(4)));
    }
    Ok(())
}

/// A missing source fails the run and names the pipeline
#[test]
fn test_run_all_reports_failure() -> par_warehouse::Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    write_sources(input.path());
    std::fs::remove_file(input.path().join("us-cities-demographics.csv"))?;

    let mut config = WarehouseConfig::new(input.path(), output.path());
    config.sources.immigration = "immigration.csv".into();
    let session = Session::new(config)?;

    match run_all(&session, &ProgressBar::hidden()) {
        Err(WarehouseError::Pipeline { pipeline, source }) => {
            assert_eq!(pipeline, "demographics");
            assert!(matches!(*source, WarehouseError::SourceRead { .. }));
        }
        other => panic!("expected a pipeline failure, got {other:?}"),
    }
    // Other pipelines still complete
    assert!(output.path().join(labels::COUNTRY_TABLE).join(SUCCESS_MARKER).is_file());
    Ok(())
}

/// SAS binary exports are rejected with a source error
#[test]
fn test_sas_binary_source_is_rejected() -> par_warehouse::Result<()> {
    let dir = TempDir::new()?;
    let path = write_file(dir.path(), "i94_apr16_sub.sas7bdat", "");
    assert!(matches!(
        read_immigration_source(&path, 1024),
        Err(WarehouseError::SourceRead { .. })
    ));
    Ok(())
}

/// Day offsets count from 1960-01-01
#[test]
fn test_sas_epoch_dates() {
    use par_warehouse::{to_calendar_date, to_iso_date_string};

    assert_eq!(to_calendar_date(0), chrono::NaiveDate::from_ymd_opt(1960, 1, 1));
    assert_eq!(to_calendar_date(20819), chrono::NaiveDate::from_ymd_opt(2016, 12, 31));
    assert_eq!(to_iso_date_string(20574).as_deref(), Some("2016-04-30"));
}
