use std::fs;
use std::path::{Path, PathBuf};

use arrow::array::{
    Array, ArrayRef, Date32Array, Decimal128Array, Int32Array, Int64Array, StringArray,
};
use par_warehouse::schema::{column, string_batch};
use par_warehouse::{RecordBatch, Result};

/// Label descriptions in the layout of the published I94 file
pub const SAMPLE_LABELS: &str = r#"/* I94 label descriptions */
libname library 'Your file location' ;
proc format library=library ;

/* I94CIT & I94RES - This format shows all the valid and invalid codes */
  value i94cntyl
   582 =  'MEXICO Air Sea, and Not Reported (I-94, no land arrivals)'
   236 =  'AFGHANISTAN'
   101 =  'ALBANIA'
   754 =  'COTE D'IVOIRE'
   999 =  'INVALID: STATELESS' ;

/* I94PORT - This format shows all the valid and invalid port codes */
  value $i94prtl
	'ALC'	=	'ALCAN, AK             '
	'ANC'	=	'ANCHORAGE, AK         '
	'BAR'	=	'BAKER AAF - BAKER ISLAND, AK'
	'NYC'	=	'NEW YORK, NY          '
	'XXX'	=	'NOT REPORTED/UNKNOWN  '
	'ZZZ'	=	'MEXICO Land (Vera Cruz), MX'
;

/* I94MODE - There are missing values as well as not reported (9) */
value i94model
	1 = 'Air'
	2 = 'Sea'
	3 = 'Land'
	9 = 'Not reported' ;

/* I94ADDR */
value i94addrl
	'AK'='ALASKA'
	'NY'='NEW YORK'
	'99'='All Other Codes'
	;
"#;

/// Write `contents` to `name` inside `dir`
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Batch of string columns, `None` meaning null
pub fn strings_batch(columns: &[(&str, &[Option<&str>])]) -> Result<RecordBatch> {
    string_batch(
        columns
            .iter()
            .map(|(name, values)| (*name, values.iter().copied().collect::<StringArray>()))
            .collect(),
    )
}

fn typed<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> &'a T {
    column(batch, name)
        .expect("column exists")
        .as_any()
        .downcast_ref::<T>()
        .expect("column type")
}

pub fn strings(batch: &RecordBatch, name: &str) -> Vec<Option<String>> {
    typed::<StringArray>(batch, name)
        .iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

pub fn ints(batch: &RecordBatch, name: &str) -> Vec<Option<i32>> {
    typed::<Int32Array>(batch, name).iter().collect()
}

pub fn longs(batch: &RecordBatch, name: &str) -> Vec<Option<i64>> {
    typed::<Int64Array>(batch, name).iter().collect()
}

pub fn dates(batch: &RecordBatch, name: &str) -> Vec<Option<i32>> {
    typed::<Date32Array>(batch, name).iter().collect()
}

/// Decimal column rendered with its scale, e.g. `"12.35"`
pub fn decimals(batch: &RecordBatch, name: &str) -> Vec<Option<String>> {
    let array = typed::<Decimal128Array>(batch, name);
    (0..array.len())
        .map(|i| array.is_valid(i).then(|| array.value_as_string(i)))
        .collect()
}

/// Number of nulls in a column
pub fn null_count(batch: &RecordBatch, name: &str) -> usize {
    let array: &ArrayRef = column(batch, name).expect("column exists");
    array.null_count()
}
